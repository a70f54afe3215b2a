//! Data models for recipe acquisition.

mod recipe;

pub use recipe::{
    Ingredient, IngredientGroup, InstructionGroup, Nutrition, Recipe, Servings,
};
