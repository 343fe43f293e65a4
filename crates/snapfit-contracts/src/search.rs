use url::{form_urlencoded, Url};

use crate::result::{IdentificationResult, MergedIdentification, UNKNOWN};

pub const DEFAULT_SEARCH_BASE: &str = "https://phia.com/search/";

/// Fields usable in a shopping search, most specific first:
/// brand, subcategory (or category), product name, color, material,
/// pattern, style.
pub trait SearchTerms {
    fn search_terms(&self) -> Vec<Option<&str>>;
}

impl SearchTerms for IdentificationResult {
    fn search_terms(&self) -> Vec<Option<&str>> {
        let kind = if is_usable(&self.subcategory) {
            &self.subcategory
        } else {
            &self.category
        };
        vec![
            Some(self.brand.as_str()),
            Some(kind.as_str()),
            self.product_name.as_deref(),
            Some(self.color.as_str()),
            self.material.as_deref(),
            Some(self.pattern.as_str()),
            Some(self.style.as_str()),
        ]
    }
}

impl SearchTerms for MergedIdentification {
    fn search_terms(&self) -> Vec<Option<&str>> {
        vec![
            self.brand.as_deref(),
            self.category.as_deref(),
            self.product_name.as_deref(),
            self.color.as_deref(),
            self.material.as_deref(),
            self.pattern.as_deref(),
            self.style.as_deref(),
        ]
    }
}

pub fn search_query(result: &impl SearchTerms) -> Option<String> {
    let parts = result
        .search_terms()
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| is_usable(part))
        .collect::<Vec<&str>>();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join(" "))
}

/// Builds a search link with the query appended to `base` as one encoded
/// path segment. Returns `None` when no field is usable or `base` is not a
/// URL that can take path segments.
///
/// Every reserved character in the query is escaped, including `&`, `+`,
/// `=` and `,`, so the segment decodes back to exactly the query text.
pub fn build_search_url(result: &impl SearchTerms, base: &str) -> Option<String> {
    let query = search_query(result)?;
    let mut url = match Url::parse(base) {
        Ok(url) => url,
        Err(err) => {
            log::warn!("invalid search base {base:?}: {err}");
            return None;
        }
    };
    if url.cannot_be_a_base() {
        log::warn!("search base {base:?} cannot take path segments");
        return None;
    }
    let segment = encode_segment(&query);
    let path = format!("{}/{segment}", url.path().trim_end_matches('/'));
    url.set_path(&path);
    Some(url.to_string())
}

// Form encoding writes spaces as `+` and escapes a literal `+` as `%2B`, so
// swapping `+` back to `%20` yields a plain path segment.
fn encode_segment(query: &str) -> String {
    form_urlencoded::byte_serialize(query.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn is_usable(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case(UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{Confidence, Level};

    fn unified() -> IdentificationResult {
        IdentificationResult {
            identified: true,
            category: "Tops".to_string(),
            subcategory: "Polo Shirt".to_string(),
            color: "Navy".to_string(),
            pattern: "Solid".to_string(),
            material: Some("Pique cotton".to_string()),
            style: "Preppy".to_string(),
            brand: "Ralph Lauren".to_string(),
            product_name: None,
            confidence: Confidence {
                brand: Level::High,
                material: Level::Medium,
            },
            reasoning: "Polo pony logo.".to_string(),
            timestamp: 1,
        }
    }

    #[test]
    fn single_color_builds_query_with_only_that_term() {
        let merged = MergedIdentification {
            color: Some("Blue".to_string()),
            ..MergedIdentification::default()
        };
        assert_eq!(search_query(&merged).as_deref(), Some("Blue"));
        assert_eq!(
            build_search_url(&merged, DEFAULT_SEARCH_BASE).as_deref(),
            Some("https://phia.com/search/Blue")
        );
    }

    #[test]
    fn no_usable_fields_yields_no_link() {
        let merged = MergedIdentification::default();
        assert_eq!(build_search_url(&merged, DEFAULT_SEARCH_BASE), None);

        let blank = MergedIdentification {
            brand: Some("  ".to_string()),
            ..MergedIdentification::default()
        };
        assert_eq!(build_search_url(&blank, DEFAULT_SEARCH_BASE), None);
    }

    #[test]
    fn unified_terms_follow_priority_order_and_encode_spaces() {
        let result = unified();
        assert_eq!(
            search_query(&result).as_deref(),
            Some("Ralph Lauren Polo Shirt Navy Pique cotton Solid Preppy")
        );
        assert_eq!(
            build_search_url(&result, DEFAULT_SEARCH_BASE).as_deref(),
            Some("https://phia.com/search/Ralph%20Lauren%20Polo%20Shirt%20Navy%20Pique%20cotton%20Solid%20Preppy")
        );
    }

    #[test]
    fn category_stands_in_for_blank_subcategory() {
        let mut result = unified();
        result.subcategory = String::new();
        result.material = None;
        result.product_name = Some("Classic Fit".to_string());
        assert_eq!(
            search_query(&result).as_deref(),
            Some("Ralph Lauren Tops Classic Fit Navy Solid Preppy")
        );
    }

    #[test]
    fn unknown_sentinels_are_skipped() {
        let mut result = unified();
        result.identified = false;
        for field in [
            &mut result.category,
            &mut result.subcategory,
            &mut result.color,
            &mut result.pattern,
            &mut result.style,
            &mut result.brand,
        ] {
            *field = UNKNOWN.to_string();
        }
        result.material = None;
        assert_eq!(build_search_url(&result, DEFAULT_SEARCH_BASE), None);
    }

    #[test]
    fn slashes_in_terms_stay_inside_one_segment() {
        let merged = MergedIdentification {
            category: Some("Category/Tops".to_string()),
            ..MergedIdentification::default()
        };
        assert_eq!(
            build_search_url(&merged, "https://example.com/find").as_deref(),
            Some("https://example.com/find/Category%2FTops")
        );
    }

    #[test]
    fn reserved_characters_are_escaped() {
        let merged = MergedIdentification {
            brand: Some("H&M".to_string()),
            product_name: Some("A+B=C, 2".to_string()),
            color: Some("50% Grey?".to_string()),
            ..MergedIdentification::default()
        };
        assert_eq!(
            build_search_url(&merged, DEFAULT_SEARCH_BASE).as_deref(),
            Some("https://phia.com/search/H%26M%20A%2BB%3DC%2C%202%2050%25%20Grey%3F")
        );
    }

    #[test]
    fn query_is_appended_after_existing_path() {
        let merged = MergedIdentification {
            color: Some("Red".to_string()),
            ..MergedIdentification::default()
        };
        assert_eq!(
            build_search_url(&merged, "https://example.com/shop/search?ref=app").as_deref(),
            Some("https://example.com/shop/search/Red?ref=app")
        );
        assert_eq!(build_search_url(&merged, "mailto:someone@example.com"), None);
    }
}
