use serde::{Deserialize, Serialize};

use super::{validators, FormErrors};

/// Comment form; a single text area
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    pub fn clean(&self, errors: &mut FormErrors) -> String {
        validators::required("text", &self.text, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_text_required() {
        let mut errors = FormErrors::new();
        let text = CommentForm { text: "  Nice post!\n".into() }.clean(&mut errors);
        assert_eq!(text, "Nice post!");
        assert!(errors.is_empty());

        CommentForm { text: " \n\t".into() }.clean(&mut errors);
        assert!(errors.has("text"));
    }
}
