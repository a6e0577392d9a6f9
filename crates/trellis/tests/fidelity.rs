//! Model/view fidelity: the row order after any sequence of mutations equals
//! replaying the same operations on a plain `Vec`, and replaying the emitted
//! change batches on a view-side mirror yields the same order.

mod common;

use common::{LayoutMirror, Mirror, identifiers, layout, live_controller, record_layouts, row};
use proptest::prelude::*;
use trellis::controller::ListController;
use trellis::model::{ListChange, Row, Section};

#[derive(Debug, Clone)]
enum Op {
    Add(u8),
    Insert(usize, u8),
    Remove(Vec<usize>),
    RemoveStranger,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u8..4).prop_map(Op::Add),
        (0usize..16, 1u8..4).prop_map(|(at, count)| Op::Insert(at, count)),
        prop::collection::vec(0usize..16, 0..4).prop_map(Op::Remove),
        Just(Op::RemoveStranger),
    ]
}

fn fresh_names(next: &mut usize, count: u8) -> Vec<String> {
    (0..count)
        .map(|_| {
            *next += 1;
            format!("r{next}")
        })
        .collect()
}

/// A mutation anywhere in a controller. Picks are reduced modulo the
/// current section or row count.
#[derive(Debug, Clone)]
enum LayoutOp {
    InsertSection { at: usize, rows: u8 },
    RemoveSection(usize),
    InsertRows { section: usize, at: usize, count: u8 },
    RemoveRows { section: usize, picks: Vec<usize> },
}

#[derive(Debug, Clone)]
enum Step {
    Single(LayoutOp),
    Batch(Vec<LayoutOp>),
}

fn layout_op() -> impl Strategy<Value = LayoutOp> {
    prop_oneof![
        (0usize..6, 0u8..3).prop_map(|(at, rows)| LayoutOp::InsertSection { at, rows }),
        (0usize..6).prop_map(LayoutOp::RemoveSection),
        (0usize..6, 0usize..8, 1u8..3).prop_map(|(section, at, count)| LayoutOp::InsertRows { section, at, count }),
        (0usize..6, prop::collection::vec(0usize..8, 1..3))
            .prop_map(|(section, picks)| LayoutOp::RemoveRows { section, picks }),
    ]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        layout_op().prop_map(Step::Single),
        prop::collection::vec(layout_op(), 0..6).prop_map(Step::Batch),
    ]
}

fn apply_layout_op(controller: &ListController, op: &LayoutOp, next: &mut usize, animated: bool) {
    let sections = controller.sections();
    match op {
        LayoutOp::InsertSection { at, rows } => {
            let section = Section::new();
            section.add_rows(fresh_names(next, *rows).iter().map(|name| row(name)), false);
            controller.insert_section(section, *at, animated);
        }
        LayoutOp::RemoveSection(pick) => {
            if !sections.is_empty() {
                controller.remove_section(&sections[pick % sections.len()], animated);
            }
        }
        LayoutOp::InsertRows { section, at, count } => {
            if !sections.is_empty() {
                let names = fresh_names(next, *count);
                sections[section % sections.len()].insert_rows(names.iter().map(|name| row(name)), *at, animated);
            }
        }
        LayoutOp::RemoveRows { section, picks } => {
            if sections.is_empty() {
                return;
            }
            let target = &sections[section % sections.len()];
            let count = target.row_count();
            if count > 0 {
                let rows: Vec<Row> = picks.iter().filter_map(|pick| target.row_at(pick % count)).collect();
                target.remove_rows(&rows, animated);
            }
        }
    }
}

proptest! {
    #[test]
    fn mixed_section_and_row_batches_replay_sequentially(
        steps in prop::collection::vec(step(), 1..16),
        animated in any::<bool>(),
    ) {
        let (controller, surface) = live_controller();
        let mut next = 0;
        let mut mirror = LayoutMirror::default();
        let (snapshots, _subscriptions) = record_layouts(&controller);

        for step in &steps {
            let applied_before = surface.batches.lock().len();
            let changes_before = snapshots.lock().len();
            match step {
                Step::Single(op) => apply_layout_op(&controller, op, &mut next, animated),
                Step::Batch(ops) => controller.perform_updates(|| {
                    for op in ops {
                        apply_layout_op(&controller, op, &mut next, animated);
                    }
                }),
            }

            let batches = surface.batches.lock();
            let new_batches = &batches[applied_before..];
            let made = snapshots.lock().len() - changes_before;
            if let Step::Batch(_) = step {
                prop_assert_eq!(new_batches.len(), usize::from(made > 0));
            }

            let changes: Vec<&ListChange> = new_batches.iter().flat_map(|batch| batch.iter()).collect();
            prop_assert_eq!(changes.len(), made);
            let snapshots = snapshots.lock();
            for (change, after) in changes.into_iter().zip(&snapshots[changes_before..]) {
                mirror.apply(change, after);
                prop_assert_eq!(&mirror.sections, after);
            }
            prop_assert_eq!(&mirror.sections, &layout(&controller));
        }

        for (index, section) in controller.sections().iter().enumerate() {
            prop_assert_eq!(section.index(), Some(index));
            for (row_index, row) in section.rows().iter().enumerate() {
                prop_assert_eq!(row.index(), Some(row_index));
            }
        }
    }

    #[test]
    fn section_mutations_match_vec_replay(ops in prop::collection::vec(op(), 1..24), animated in any::<bool>()) {
        let (controller, surface) = live_controller();
        let section = Section::new();
        controller.add_section(section.clone(), false);

        let mut expected: Vec<String> = Vec::new();
        let mut mirror = Mirror::new(Vec::new());
        let mut next = 0;

        for op in ops {
            let applied_before = surface.batches.lock().len();
            match op {
                Op::Add(count) => {
                    let names = fresh_names(&mut next, count);
                    section.add_rows(names.iter().map(|name| row(name)), animated);
                    expected.extend(names);
                }
                Op::Insert(at, count) => {
                    let names = fresh_names(&mut next, count);
                    section.insert_rows(names.iter().map(|name| row(name)), at, animated);
                    let at = at.min(expected.len());
                    expected.splice(at..at, names);
                }
                Op::Remove(picks) => {
                    if expected.is_empty() {
                        continue;
                    }
                    let len = expected.len();
                    let targets: Vec<Row> = picks
                        .iter()
                        .filter_map(|pick| section.row_at(pick % len))
                        .collect();
                    let mut indices: Vec<usize> = picks.iter().map(|pick| pick % len).collect();
                    indices.sort_unstable();
                    indices.dedup();

                    let removed = section.remove_rows(&targets, animated);
                    prop_assert_eq!(removed, indices.len());
                    for index in indices.into_iter().rev() {
                        expected.remove(index);
                    }
                }
                Op::RemoveStranger => {
                    prop_assert!(!section.remove_row(&row("stranger"), animated));
                }
            }

            let model = identifiers(&section);
            for batch in &surface.batches.lock()[applied_before..] {
                mirror.replay(batch, &model);
            }
            prop_assert_eq!(&model, &expected);
            prop_assert_eq!(&mirror.rows, &expected);

            for (index, row) in section.rows().iter().enumerate() {
                prop_assert_eq!(row.index(), Some(index));
            }
        }
    }

    #[test]
    fn batched_mutations_apply_once(counts in prop::collection::vec(1u8..4, 1..6)) {
        let (controller, surface) = live_controller();
        let section = Section::new();
        controller.add_section(section.clone(), false);
        let applied_before = surface.batches.lock().len();

        let mut next = 0;
        let mut expected = Vec::new();
        controller.perform_updates(|| {
            for count in &counts {
                let names = fresh_names(&mut next, *count);
                section.insert_rows(names.iter().map(|name| row(name)), 0, true);
                expected.splice(0..0, names);
            }
        });

        let batches = surface.batches.lock();
        prop_assert_eq!(batches.len(), applied_before + 1);
        prop_assert_eq!(batches[applied_before].len(), counts.len());
        prop_assert_eq!(identifiers(&section), expected);
    }
}

#[test]
fn removing_absent_row_leaves_indices_untouched() {
    let (controller, surface) = live_controller();
    let section = Section::new();
    controller.add_section(section.clone(), false);
    let rows: Vec<Row> = ["a", "b", "c"].into_iter().map(row).collect();
    section.add_rows(rows.clone(), false);
    let changes_before = surface.change_count();

    let other = Section::new();
    let detached = row("x");
    other.add_row(detached.clone(), false);

    assert!(!section.remove_row(&detached, true));
    assert_eq!(surface.change_count(), changes_before);
    assert_eq!(detached.section(), Some(other));
    for (index, row) in rows.iter().enumerate() {
        assert_eq!(row.index(), Some(index));
    }
}
