//! Jump targets of navigation responses.
//!
//! Once a definition-style response is rewritten, targets inside the notebook carry the Facade
//! URI and Facade lines. The server may answer with a `Location`, a `LocationLink` or an array
//! of either; [`locations_from_value`] flattens those shapes and [`navigation_targets`] ties
//! each target to the cell it lands in, so the host can reveal that cell directly.

use crate::lsp_sync::LspRange;
use notebook_core::{CellId, NotebookState};
use serde_json::Value;

/// One target of a navigation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LspLocation {
    /// Target document URI.
    pub uri: String,
    /// Target range; for a link, the selection range when the server sent one.
    pub range: LspRange,
}

/// A navigation target resolved against the notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTarget {
    /// Where to jump.
    pub location: LspLocation,
    /// Cell containing the target line, when the target is the notebook itself.
    pub cell: Option<CellId>,
}

fn location_from_value(value: &Value) -> Option<LspLocation> {
    if let Some(uri) = value.get("uri").and_then(Value::as_str) {
        let range = value.get("range").and_then(LspRange::from_value)?;
        return Some(LspLocation {
            uri: uri.to_string(),
            range,
        });
    }
    let uri = value.get("targetUri").and_then(Value::as_str)?;
    let range = ["targetSelectionRange", "targetRange"]
        .into_iter()
        .find_map(|key| value.get(key).and_then(LspRange::from_value))?;
    Some(LspLocation {
        uri: uri.to_string(),
        range,
    })
}

/// Flatten `Location | Location[] | LocationLink | LocationLink[] | null`.
pub fn locations_from_value(value: &Value) -> Vec<LspLocation> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().filter_map(location_from_value).collect(),
        single => location_from_value(single).into_iter().collect(),
    }
}

/// Targets of a rewritten navigation result. Those addressing `facade_uri` are tied to the
/// cell whose block holds their start line; a target on a separator line has no cell.
pub fn navigation_targets(
    value: &Value,
    facade_uri: &str,
    state: &NotebookState,
) -> Vec<NavigationTarget> {
    locations_from_value(value)
        .into_iter()
        .map(|location| {
            let line = location.range.start.line as usize;
            let cell = (location.uri == facade_uri)
                .then(|| state.cell_at(line))
                .flatten()
                .filter(|&index| state.range_of(index).is_some_and(|range| line <= range.end))
                .and_then(|index| state.cells().get(index))
                .map(|cell| cell.id.clone());
            NavigationTarget { location, cell }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notebook_core::{Cell, CellKind, NotebookConfig};
    use serde_json::json;

    fn range(line: u32, from: u32, to: u32) -> Value {
        json!({ "start": { "line": line, "character": from }, "end": { "line": line, "character": to } })
    }

    #[test]
    fn test_link_prefers_selection_range_and_skips_junk() {
        let v = json!([{
            "targetUri": "file:///nb.ipynb",
            "targetRange": { "start": { "line": 1, "character": 0 }, "end": { "line": 9, "character": 0 } },
            "targetSelectionRange": range(2, 4, 8)
        }, { "bogus": true }, { "uri": "file:///x.py" }]);
        let locs = locations_from_value(&v);
        assert_eq!(locs.len(), 1);
        assert_eq!(locs[0].range.start.line, 2);
        assert_eq!(locs[0].range.end.character, 8);
        assert!(locations_from_value(&Value::Null).is_empty());
    }

    #[test]
    fn test_targets_resolve_to_cells() {
        // 0 start, 1 "a = 1", 2 end, 3 blank, 4 start, 5 "b = a", 6 end, 7 blank
        let state = NotebookState::from_cells(
            vec![
                Cell::new(CellId::new("c1"), CellKind::Code, "a = 1"),
                Cell::new(CellId::new("c2"), CellKind::Code, "b = a"),
            ],
            NotebookConfig::default(),
        )
        .unwrap();
        let v = json!([
            { "uri": "file:///nb.ipynb", "range": range(5, 0, 1) },
            { "uri": "file:///nb.ipynb", "range": range(3, 0, 0) },
            { "uri": "file:///lib.py", "range": range(1, 0, 1) }
        ]);
        let targets = navigation_targets(&v, "file:///nb.ipynb", &state);
        assert_eq!(targets[2].location.uri, "file:///lib.py");
        let cells: Vec<Option<&str>> = targets
            .iter()
            .map(|target| target.cell.as_ref().map(CellId::as_str))
            .collect();
        assert_eq!(cells, vec![Some("c2"), None, None]);
    }
}
