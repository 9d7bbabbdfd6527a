//! Block planning
//!
//! This module derives the category-to-key mapping for each of the seven
//! blocks and expands the stimulus catalog into the unordered trial set for a
//! block. Planning is pure: given the same catalog, block number, and test
//! model it always produces the same trials.
//!
//! Canonical design (effective block numbers):
//! - 1: target practice (disorder vs normal)
//! - 2: attribute practice (negative vs positive)
//! - 3/4: combined, disorder-with-negative pairing
//! - 5: attribute practice with sides reversed
//! - 6/7: combined, disorder-with-positive pairing

use crate::catalog::StimulusCatalog;
use crate::error::EngineError;
use crate::types::{BlockSpec, CategoryTag, KeySide, TestModel, Trial};
use std::collections::HashMap;

/// Number of blocks in the procedure
pub const BLOCK_COUNT: u8 = 7;

/// Remap a presented block number to its effective block under the given
/// counterbalancing model. Identity for model A; model B swaps 2↔5, 3↔6,
/// and 4↔7. The remap is an involution.
pub fn remap(block: u8, model: TestModel) -> u8 {
    match model {
        TestModel::A => block,
        TestModel::B => match block {
            2 => 5,
            3 => 6,
            4 => 7,
            5 => 2,
            6 => 3,
            7 => 4,
            other => other,
        },
    }
}

/// Derive the block specification (categories shown and their sides) for a
/// presented block number under the given model.
pub fn block_spec(block: u8, model: TestModel) -> Result<BlockSpec, EngineError> {
    if !(1..=BLOCK_COUNT).contains(&block) {
        return Err(EngineError::InvalidBlock(block));
    }

    let effective_block = remap(block, model);
    let mut key_mapping: HashMap<CategoryTag, KeySide> = HashMap::new();

    match effective_block {
        1 => {
            key_mapping.insert(CategoryTag::CommunicationDisorder, KeySide::Left);
            key_mapping.insert(CategoryTag::NormalCommunication, KeySide::Right);
        }
        2 => {
            key_mapping.insert(CategoryTag::NegativeAttribute, KeySide::Left);
            key_mapping.insert(CategoryTag::PositiveAttribute, KeySide::Right);
        }
        3 | 4 => {
            key_mapping.insert(CategoryTag::CommunicationDisorder, KeySide::Left);
            key_mapping.insert(CategoryTag::NegativeAttribute, KeySide::Left);
            key_mapping.insert(CategoryTag::NormalCommunication, KeySide::Right);
            key_mapping.insert(CategoryTag::PositiveAttribute, KeySide::Right);
        }
        5 => {
            key_mapping.insert(CategoryTag::PositiveAttribute, KeySide::Left);
            key_mapping.insert(CategoryTag::NegativeAttribute, KeySide::Right);
        }
        6 | 7 => {
            key_mapping.insert(CategoryTag::CommunicationDisorder, KeySide::Left);
            key_mapping.insert(CategoryTag::PositiveAttribute, KeySide::Left);
            key_mapping.insert(CategoryTag::NormalCommunication, KeySide::Right);
            key_mapping.insert(CategoryTag::NegativeAttribute, KeySide::Right);
        }
        other => return Err(EngineError::InvalidBlock(other)),
    }

    Ok(BlockSpec {
        block,
        effective_block,
        key_mapping,
    })
}

/// How many times each included stimulus appears in a block.
///
/// Two-category practice blocks (effective 1, 2, 5) repeat the stimulus set
/// twice; the combined blocks show the full four-category union once
/// (effective 3, 6) or twice (the double-length blocks 4 and 7).
fn multiplicity(effective_block: u8) -> usize {
    match effective_block {
        1 | 2 | 5 => 2,
        3 | 6 => 1,
        4 | 7 => 2,
        _ => 0,
    }
}

/// Expected trial count for a block given a catalog
pub fn expected_trial_count(catalog: &StimulusCatalog, block: u8, model: TestModel) -> usize {
    let effective_block = remap(block, model);
    let n = catalog.per_category_count();
    let category_count = match effective_block {
        1 | 2 | 5 => 2,
        _ => 4,
    };
    n * category_count * multiplicity(effective_block)
}

/// Expand the catalog into the unordered trial set for a block. Every
/// stimulus belonging to an included category appears exactly
/// `multiplicity` times; no sampling, no omission.
pub fn plan_block(
    catalog: &StimulusCatalog,
    block: u8,
    model: TestModel,
) -> Result<Vec<Trial>, EngineError> {
    catalog.validate()?;
    let spec = block_spec(block, model)?;

    let categories = spec.categories();
    let included = catalog.items_in(&categories);
    let repeats = multiplicity(spec.effective_block);

    let mut trials = Vec::with_capacity(included.len() * repeats);
    for _ in 0..repeats {
        for item in &included {
            // Included categories always carry a mapping in a spec produced
            // by block_spec.
            let correct_response = spec.key_for(item.category).ok_or_else(|| {
                EngineError::InvalidCatalog(format!(
                    "category {} has no key mapping in block {}",
                    item.category.as_str(),
                    block
                ))
            })?;
            trials.push(Trial {
                stimulus: (*item).clone(),
                block: spec.block,
                effective_block: spec.effective_block,
                correct_response,
            });
        }
    }

    Ok(trials)
}

/// Whether the transition from `prev` to `next` flips a shared category to
/// the opposite side. When it does, the participant must acknowledge a
/// blocking "categories have changed" notice before the next block starts.
/// In the canonical sequence this fires exactly when entering presented
/// block 5.
pub fn reversal_notice_required(prev: &BlockSpec, next: &BlockSpec) -> bool {
    next.key_mapping.iter().any(|(category, side)| {
        prev.key_for(*category)
            .map(|prev_side| prev_side == side.flipped())
            .unwrap_or(false)
    })
}
