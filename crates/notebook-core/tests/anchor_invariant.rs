//! Randomized validation of the coordinate invariants.
//!
//! Runs seeded sequences of content edits, structural edits and undo/redo, and after every step
//! checks that:
//! 1. every cell's range spans `2 + content_line_count` lines, ranges are contiguous and
//!    separated by exactly one blank line;
//! 2. the Shadow has the Facade's line count and mirrors exactly the code lines;
//! 3. the Facade re-parses to the Cell Store's contents.

use notebook_core::{
    Cell, CellId, CellKind, FacadeEdit, NotebookConfig, NotebookState, ParsedCell, UndoJoin,
    content_line_count,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const KINDS: [CellKind; 3] = [CellKind::Code, CellKind::Markdown, CellKind::Raw];
const SNIPPETS: [&str; 8] = [
    "",
    "x = 1",
    "a\nb",
    "def f():\n    pass",
    "\n",
    "# note",
    "# <<ipynb:markdown>>",
    "y = 2\n# <<ipynb:code>>",
];
const TYPED: [&str; 3] = ["z", "\n", "# <<ipynb:raw>>"];

fn assert_invariants(state: &NotebookState, step: usize) {
    let mut expected_start = 0;
    for (index, cell) in state.cells().iter().enumerate() {
        let range = state
            .range_of(index)
            .unwrap_or_else(|| panic!("step {step}: cell {index} has no range"));
        assert_eq!(range.start, expected_start, "step {step}: cell {index} start");
        assert_eq!(
            range.end - range.start + 1,
            2 + content_line_count(&cell.source),
            "step {step}: cell {index} span"
        );
        assert_eq!(state.cell_at(range.end), Some(index), "step {step}");
        expected_start = range.end + 2;
    }
    assert_eq!(state.facade().line_count(), expected_start.max(1), "step {step}");

    let facade = state.facade().lines();
    let shadow = state.shadow().buffer().lines();
    assert_eq!(shadow.len(), facade.len(), "step {step}: shadow line count");
    for (index, cell) in state.cells().iter().enumerate() {
        let range = state.range_of(index).unwrap();
        for line in range.start..=range.end {
            let inside_code = cell.kind.is_code() && range.contains_content(line);
            if inside_code {
                assert_eq!(shadow[line], facade[line], "step {step}: line {line}");
            } else {
                assert_eq!(shadow[line], "", "step {step}: line {line}");
            }
        }
    }

    let parsed = state
        .markers()
        .parse(&state.facade().text())
        .unwrap_or_else(|err| panic!("step {step}: {err}"));
    let stored: Vec<ParsedCell> = state.cells().iter().map(ParsedCell::from).collect();
    assert_eq!(parsed, stored, "step {step}: facade/store mismatch");
    assert!(state.check_invariants().is_ok(), "step {step}");
}

fn random_step(state: &mut NotebookState, rng: &mut StdRng) {
    let len = state.cells().len();
    match rng.gen_range(0..10) {
        0 => {
            let index = rng.gen_range(0..=len);
            let kind = KINDS[rng.gen_range(0..KINDS.len())];
            let source = SNIPPETS[rng.gen_range(0..SNIPPETS.len())];
            state.insert_cell(index, kind, source).unwrap();
        }
        1 if len > 0 => {
            state.delete_cell(rng.gen_range(0..len)).unwrap();
        }
        2 if len > 0 => {
            state
                .move_cell(rng.gen_range(0..len), rng.gen_range(0..len))
                .unwrap();
        }
        3 if len > 0 => {
            let kind = KINDS[rng.gen_range(0..KINDS.len())];
            state.set_cell_kind(rng.gen_range(0..len), kind).unwrap();
        }
        4 if len > 0 => {
            let source = SNIPPETS[rng.gen_range(0..SNIPPETS.len())];
            state.set_cell_source(rng.gen_range(0..len), source).unwrap();
        }
        5 | 6 if len > 0 => {
            let index = rng.gen_range(0..len);
            if state.edit().map(|e| e.cell()) != state.cells().get(index).map(|c| &c.id) {
                state.open_edit(index).unwrap();
            }
            for _ in 0..rng.gen_range(1..4) {
                let text = TYPED[rng.gen_range(0..TYPED.len())];
                let edit = state.edit_mut().unwrap();
                let pos = rng.gen_range(0..=edit.buffer().len_chars());
                edit.buffer_mut().replace(pos, pos, text, UndoJoin::Break);
                state.sync_edit().unwrap();
            }
            if rng.gen_bool(0.5) {
                state.commit_edit().unwrap();
            }
        }
        7 if len > 0 => {
            let range = state.range_of(rng.gen_range(0..len)).unwrap();
            // Content start, end marker (adds a content line) or separator (layout only).
            let (line, text) = match rng.gen_range(0..3) {
                0 => (range.start + 1, "q"),
                1 => (range.end, "\n"),
                _ => (range.end + 1, "\n"),
            };
            state
                .edit_facade(&[FacadeEdit::new((line, 0), (line, 0), text)], UndoJoin::Break)
                .unwrap();
        }
        8 => {
            state.undo().unwrap();
        }
        9 => {
            state.redo().unwrap();
        }
        _ => {
            state.close_edit();
        }
    }
}

fn run(seed: u64, steps: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut state = NotebookState::from_cells(
        vec![
            Cell::new(CellId::new("h"), CellKind::Markdown, "# heading"),
            Cell::new(CellId::new("x"), CellKind::Code, "x = 1"),
            Cell::new(CellId::new("y"), CellKind::Code, "y = 2"),
        ],
        NotebookConfig::default(),
    ).unwrap();
    assert_invariants(&state, 0);
    for step in 1..=steps {
        random_step(&mut state, &mut rng);
        assert_invariants(&state, step);
    }
}

#[test]
fn test_random_sequences_keep_invariants() {
    for seed in 0..20 {
        run(seed, 150);
    }
}

#[test]
fn test_every_cell_id_is_unique() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut state = NotebookState::from_cells(Vec::new(), NotebookConfig::default()).unwrap();
    for _ in 0..300 {
        random_step(&mut state, &mut rng);
        let mut ids: Vec<&CellId> = state.cells().iter().map(|c| &c.id).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }
}
