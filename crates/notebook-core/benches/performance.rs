use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use notebook_core::{
    Cell, CellId, CellKind, CellStore, Markers, NotebookConfig, NotebookState, ParsedCell,
    UndoJoin,
};

fn large_notebook(cell_count: usize) -> Vec<Cell> {
    (0..cell_count)
        .map(|i| {
            let (kind, source) = if i % 3 == 0 {
                (CellKind::Markdown, format!("## Section {i}\nSome prose for section {i}."))
            } else {
                (
                    CellKind::Code,
                    format!("def f_{i}(x):\n    y = x * {i}\n    return y + 1\n\nf_{i}(2)"),
                )
            };
            Cell::new(CellId::new(format!("cell-{i}")), kind, source)
        })
        .collect()
}

fn bench_render_and_parse(c: &mut Criterion) {
    let cells = large_notebook(2_000);
    let markers = Markers::new(&NotebookConfig::default());
    let text = markers.render(&cells);

    c.bench_function("render/2k_cells", |b| {
        b.iter(|| black_box(markers.render(black_box(&cells))))
    });
    c.bench_function("parse/2k_cells", |b| {
        b.iter(|| black_box(markers.parse(black_box(&text)).unwrap()))
    });
}

fn bench_reconcile(c: &mut Criterion) {
    let cells = large_notebook(2_000);
    let parsed: Vec<ParsedCell> = cells.iter().map(ParsedCell::from).collect();

    c.bench_function("reconcile/2k_cells_unchanged", |b| {
        b.iter_batched(
            || CellStore::from_cells(cells.clone()),
            |mut store| {
                store.reconcile(parsed.clone());
                black_box(store.len());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_typing_in_edit_surface(c: &mut Criterion) {
    let cells = large_notebook(500);

    c.bench_function("edit_surface/100_keystrokes", |b| {
        b.iter_batched(
            || {
                let mut state =
                    NotebookState::from_cells(cells.clone(), NotebookConfig::default()).unwrap();
                state.open_edit(250).unwrap();
                state
            },
            |mut state| {
                for _ in 0..100 {
                    let edit = state.edit_mut().unwrap();
                    let end = edit.buffer().len_chars();
                    edit.buffer_mut().replace(end, end, "x", UndoJoin::Break);
                    state.sync_edit().unwrap();
                }
                black_box(state.facade().revision());
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(
    benches,
    bench_render_and_parse,
    bench_reconcile,
    bench_typing_in_edit_surface
);
criterion_main!(benches);
