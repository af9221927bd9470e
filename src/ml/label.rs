// ============================================================
// Layer 5 — Labels
// ============================================================
// The fixed label set the learned models score:
//
//   have, want, have-want (both sides), rate, background
//
// The per-token classifier and the group decoder use all five;
// the field decoder uses have / want / rate only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::annotation::Tag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Label {
    Have,
    Want,
    HaveWant,
    Rate,
    Background,
}

impl Label {
    pub const ALL: [Label; 5] = [
        Label::Have,
        Label::Want,
        Label::HaveWant,
        Label::Rate,
        Label::Background,
    ];

    /// Name used inside feature keys, and for tie-breaking
    pub fn name(self) -> &'static str {
        match self {
            Label::Have       => "have",
            Label::Want       => "want",
            Label::HaveWant   => "have-want",
            Label::Rate       => "rate",
            Label::Background => "background",
        }
    }

    /// Annotation tags this label writes
    pub fn tags(self) -> &'static [Tag] {
        match self {
            Label::Have       => &[Tag::Have],
            Label::Want       => &[Tag::Want],
            Label::HaveWant   => &[Tag::Have, Tag::Want],
            Label::Rate       => &[Tag::Rate],
            Label::Background => &[],
        }
    }

    /// True when a token carrying `tags` supports this label.
    /// Background is never supported directly; callers decide it.
    pub fn supported_by(self, tags: &BTreeSet<Tag>) -> bool {
        match self {
            Label::Background => false,
            other => other.tags().iter().all(|t| tags.contains(t)),
        }
    }

    /// The single gold label of a token for the per-token classifier:
    /// have+want → have-want, else have, else want, else rate.
    pub fn from_tags(tags: Option<&BTreeSet<Tag>>) -> Label {
        let Some(tags) = tags else {
            return Label::Background;
        };
        match (tags.contains(&Tag::Have), tags.contains(&Tag::Want)) {
            (true, true)  => Label::HaveWant,
            (true, false) => Label::Have,
            (false, true) => Label::Want,
            _ if tags.contains(&Tag::Rate) => Label::Rate,
            _ => Label::Background,
        }
    }
}

impl From<Tag> for Label {
    fn from(tag: Tag) -> Self {
        match tag {
            Tag::Have => Label::Have,
            Tag::Want => Label::Want,
            Tag::Rate => Label::Rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tags_priority() {
        let both: BTreeSet<Tag> = [Tag::Have, Tag::Want, Tag::Rate].into();
        assert_eq!(Label::from_tags(Some(&both)), Label::HaveWant);
        let rate: BTreeSet<Tag> = [Tag::Rate].into();
        assert_eq!(Label::from_tags(Some(&rate)), Label::Rate);
        assert_eq!(Label::from_tags(None), Label::Background);
    }

    #[test]
    fn test_have_want_needs_both_tags() {
        let have: BTreeSet<Tag> = [Tag::Have].into();
        assert!(Label::Have.supported_by(&have));
        assert!(!Label::HaveWant.supported_by(&have));
        assert!(!Label::Background.supported_by(&have));
    }
}
