//! Grounding text assembly for the downstream language model

/// Instruction placed before every set of paper excerpts
pub const GROUNDING_INSTRUCTION: &str = "This is an English Text, reply in English. \
Use relevant papers to answer the question. If question is not in papers, then mention \
that your answer is general knowledge and may be incorrect. Be as detailed as you can \
when referencing or summarizing papers. If salutations and such, answer politely.\n";

/// One excerpt taken from a paper
#[derive(Debug, Clone, PartialEq)]
pub struct PaperExcerpt {
    pub title: String,
    /// Category label and the text found for it
    pub category: Option<(String, String)>,
    pub content: String,
}

impl PaperExcerpt {
    fn render(&self, out: &mut String) {
        out.push_str("\nPossible Relevant Paper: ");
        out.push_str(&self.title);
        out.push('\n');
        if let Some((label, value)) = &self.category {
            out.push_str(label);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
        out.push_str("Content: ");
        out.push_str(&self.content);
        out.push('\n');
    }
}

/// Accumulates excerpts behind the fixed instruction
#[derive(Debug, Default)]
pub struct GroundingBuilder {
    excerpts: Vec<PaperExcerpt>,
}

impl GroundingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, excerpt: PaperExcerpt) {
        self.excerpts.push(excerpt);
    }

    pub fn len(&self) -> usize {
        self.excerpts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.excerpts.is_empty()
    }

    /// Instruction followed by every excerpt in insertion order
    pub fn build(&self) -> String {
        let mut text = String::from(GROUNDING_INSTRUCTION);
        for excerpt in &self.excerpts {
            excerpt.render(&mut text);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_grounding_is_instruction_only() {
        let text = GroundingBuilder::new().build();
        assert_eq!(text, GROUNDING_INSTRUCTION);
        assert!(text.contains("general knowledge"));
    }

    #[test]
    fn test_excerpt_format() {
        let mut builder = GroundingBuilder::new();
        builder.push(PaperExcerpt {
            title: "Root growth in orbit".into(),
            category: Some(("Methods".into(), "Seeds were germinated.".into())),
            content: "Roots grew.".into(),
        });
        builder.push(PaperExcerpt {
            title: "Bone loss in mice".into(),
            category: None,
            content: "Bone density fell.".into(),
        });

        let text = builder.build();
        let body = text.strip_prefix(GROUNDING_INSTRUCTION).unwrap();
        assert_eq!(
            body,
            "\nPossible Relevant Paper: Root growth in orbit\nMethods: Seeds were germinated.\nContent: Roots grew.\n\
             \nPossible Relevant Paper: Bone loss in mice\nContent: Bone density fell.\n"
        );
    }
}
