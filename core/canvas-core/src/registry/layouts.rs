//! Generic layout catalog shared by every context.

use super::descriptor::LayoutDescriptor;

const GENERIC_LAYOUTS: [(&str, &str); 3] = [
    ("single", "Single panel"),
    ("split-horizontal", "Side by side"),
    ("split-vertical", "Stacked"),
];

/// Looks up a layout that is not specific to any context.
pub fn generic_layout(id: &str) -> Option<LayoutDescriptor> {
    GENERIC_LAYOUTS
        .iter()
        .find(|(layout_id, _)| *layout_id == id)
        .map(|(layout_id, label)| LayoutDescriptor::new(*layout_id, *label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_known_generic_layout() {
        let layout = generic_layout("split-vertical").expect("layout");
        assert_eq!(layout.label, "Stacked");
    }

    #[test]
    fn unknown_layout_is_none() {
        assert!(generic_layout("carousel").is_none());
    }
}
