use std::path::Path;

use anyhow::Context;

/// Instruction text sent with every capture, tagged with a version so logs
/// and stored results can be traced back to the contract that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContract {
    pub version: String,
    pub text: String,
}

pub const IDENTIFY_PROMPT_VERSION: &str = "identify-v3";
pub const BRAND_PROMPT_VERSION: &str = "brand-v1";

const IDENTIFY_PROMPT: &str = "You are a fashion identification assistant. Identify the single clothing item at the visual focal point of this photo: the item in focus at the center of the frame. If several items are visible, do NOT pick the largest one; pick the one the camera is centered and focused on.

Respond with JSON only (no markdown, no prose) using exactly these fields:
{
  \"identified\": boolean,
  \"category\": string,
  \"subcategory\": string,
  \"color\": string,
  \"pattern\": string,
  \"material\": string | null,
  \"style\": string,
  \"brand\": string,
  \"productName\": string | null,
  \"confidence\": { \"brand\": \"high\" | \"medium\" | \"low\" | \"none\", \"material\": \"high\" | \"medium\" | \"low\" | \"none\" },
  \"reasoning\": string
}

Rules:
- \"brand\" must ALWAYS contain your best guess, never null or empty. Use logos, labels, hardware, stitching and silhouette. Express uncertainty through confidence.brand, not by leaving the brand out.
- Use null for material or productName only when you cannot tell.
- If no clothing item can be confidently located (blurry photo, no garment, ambiguous subject), set \"identified\": false, set category, subcategory, color, pattern and style to \"Unknown\", set brand to \"Unknown\", set confidence.brand to \"none\", and explain why in \"reasoning\".";

const BRAND_PROMPT: &str = "Analyze this clothing item. Identify the brand if visible (logos, labels, distinctive patterns). Respond with JSON only: { \"brand\": string | null, \"productName\": string | null, \"confidence\": \"high\" | \"medium\" | \"low\", \"reasoning\": string }";

impl PromptContract {
    pub fn new(version: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            text: text.into(),
        }
    }

    pub fn identify() -> Self {
        Self::new(IDENTIFY_PROMPT_VERSION, IDENTIFY_PROMPT)
    }

    pub fn brand_only() -> Self {
        Self::new(BRAND_PROMPT_VERSION, BRAND_PROMPT)
    }

    /// Loads a replacement prompt; the file stem becomes the version.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading prompt {}", path.display()))?;
        if text.trim().is_empty() {
            anyhow::bail!("prompt {} is empty", path.display());
        }
        let version = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("custom")
            .to_string();
        Ok(Self::new(version, text.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::PromptContract;

    #[test]
    fn identify_prompt_keeps_its_contract_clauses() {
        let prompt = PromptContract::identify();
        assert_eq!(prompt.version, "identify-v3");
        assert!(prompt.text.contains("focal point"));
        assert!(prompt.text.contains("do NOT pick the largest"));
        assert!(prompt.text.contains("JSON only"));
        assert!(prompt.text.contains("never null or empty"));
        assert!(prompt.text.contains("\"identified\": false"));
        for field in [
            "identified",
            "category",
            "subcategory",
            "color",
            "pattern",
            "material",
            "style",
            "brand",
            "productName",
            "confidence",
            "reasoning",
        ] {
            assert!(prompt.text.contains(&format!("\"{field}\"")), "missing {field}");
        }
    }

    #[test]
    fn prompt_file_uses_stem_as_version() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("identify-v4.txt");
        std::fs::write(&path, "  Identify the garment.\n")?;
        let prompt = PromptContract::from_file(&path)?;
        assert_eq!(prompt.version, "identify-v4");
        assert_eq!(prompt.text, "Identify the garment.");

        let empty = temp.path().join("blank.txt");
        std::fs::write(&empty, "\n")?;
        assert!(PromptContract::from_file(&empty).is_err());
        Ok(())
    }
}
