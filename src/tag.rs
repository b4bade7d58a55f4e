//! Serialization tag parsing: `name[,option...]`.

/// What a field's serialization tag says about its serialized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTag {
    /// Tagged exactly `-`: absent from serialized form.
    Skip,
    Present {
        /// Serialized name; empty for flattened fields.
        name: String,
        inline: bool,
        omit_empty: bool,
    },
}

impl FieldTag {
    /// Parse a tag value. `-,` names a field `-`; only a bare `-` skips it.
    /// An empty name marks the field inline, as do anonymous (`embedded`) fields.
    pub fn parse(tag: &str, embedded: bool) -> Self {
        let mut opts = tag.split(',');
        let name = opts.next().unwrap_or_default();
        let rest: Vec<&str> = opts.collect();
        if name == "-" && rest.is_empty() {
            return FieldTag::Skip;
        }
        let mut inline = false;
        let mut omit_empty = false;
        for opt in rest {
            match opt.trim() {
                "inline" => inline = true,
                "omitempty" => omit_empty = true,
                _ => {}
            }
        }
        FieldTag::Present {
            name: name.to_string(),
            inline: inline || embedded || name.is_empty(),
            omit_empty,
        }
    }
}
