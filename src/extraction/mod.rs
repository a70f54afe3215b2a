//! From raw model text to a canonical recipe.

pub mod json_repair;
pub mod normalize;

pub use json_repair::{extract_json, extract_json_traced, JsonRepairError, RepairTier, Repaired};
pub use normalize::{NormalizeConfig, Normalizer, UnitTable};
