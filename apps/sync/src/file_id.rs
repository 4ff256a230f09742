//! Per-file identifiers stored in YAML front matter.
//!
//! ```markdown
//! ---
//! mnmd_file_id: 3f9a1c2e
//! ---
//! ```
//!
//! Every note created from a file is tagged `mnmd-file-<id>`, so notes whose
//! markers were deleted can be found again even after the file is renamed.

use uuid::Uuid;

pub const FILE_ID_KEY: &str = "mnmd_file_id";

const FENCE: &str = "---";

/// New random file id.
pub fn generate() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Tag shared by all notes of a file.
pub fn file_tag(file_id: &str) -> String {
    format!("mnmd-file-{file_id}")
}

/// Split leading front matter (fences included) from the body.
///
/// Returns an empty front matter when the document has none.
pub fn split_front_matter(content: &str) -> (&str, &str) {
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return ("", content);
    };

    let mut end = content.len() - rest.len();
    for line in rest.split_inclusive('\n') {
        end += line.len();
        if line.trim_end() == FENCE {
            return content.split_at(end);
        }
    }
    ("", content)
}

/// File id recorded in the front matter, if any.
pub fn extract_file_id(content: &str) -> Option<String> {
    let (front_matter, _) = split_front_matter(content);
    front_matter.lines().find_map(|line| {
        let value = line.strip_prefix(FILE_ID_KEY)?.trim_start().strip_prefix(':')?;
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Make sure the document has a file id.
///
/// Returns the id and, when one had to be added, the updated content.
pub fn ensure_file_id(content: &str) -> (String, Option<String>) {
    if let Some(id) = extract_file_id(content) {
        return (id, None);
    }

    let id = generate();
    let entry = format!("{FILE_ID_KEY}: {id}\n");
    let (front_matter, body) = split_front_matter(content);

    let updated = if front_matter.is_empty() {
        format!("{FENCE}\n{entry}{FENCE}\n\n{content}")
    } else {
        // Insert just before the closing fence.
        let closing = front_matter
            .trim_end_matches(['\r', '\n'])
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        format!(
            "{}{}{}{}",
            &front_matter[..closing],
            entry,
            &front_matter[closing..],
            body
        )
    };

    (id, Some(updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_front_matter() {
        let content = "---\ntitle: Geo\n---\nBody {{x}}";
        assert_eq!(split_front_matter(content), ("---\ntitle: Geo\n---\n", "Body {{x}}"));
        assert_eq!(split_front_matter("No front matter"), ("", "No front matter"));
        assert_eq!(split_front_matter("---\nunclosed"), ("", "---\nunclosed"));
    }

    #[test]
    fn test_extract_file_id() {
        assert_eq!(
            extract_file_id("---\nmnmd_file_id: abc123\n---\n"),
            Some("abc123".to_string())
        );
        assert_eq!(
            extract_file_id("---\nmnmd_file_id: \"q1\"\n---\n"),
            Some("q1".to_string())
        );
        assert_eq!(extract_file_id("mnmd_file_id: body-only"), None);
    }

    #[test]
    fn test_ensure_adds_front_matter() {
        let (id, updated) = ensure_file_id("Body");
        let updated = updated.unwrap();
        assert_eq!(id.len(), 8);
        assert_eq!(updated, format!("---\nmnmd_file_id: {id}\n---\n\nBody"));
        assert_eq!(extract_file_id(&updated), Some(id));
    }

    #[test]
    fn test_ensure_extends_existing_front_matter() {
        let (id, updated) = ensure_file_id("---\ntitle: Geo\n---\nBody");
        assert_eq!(
            updated.unwrap(),
            format!("---\ntitle: Geo\nmnmd_file_id: {id}\n---\nBody")
        );
    }

    #[test]
    fn test_ensure_keeps_existing_id() {
        let (id, updated) = ensure_file_id("---\nmnmd_file_id: keep\n---\nBody");
        assert_eq!(id, "keep");
        assert_eq!(updated, None);
    }

    #[test]
    fn test_file_tag() {
        assert_eq!(file_tag("abc"), "mnmd-file-abc");
    }
}
