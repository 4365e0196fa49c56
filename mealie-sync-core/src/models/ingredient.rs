use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IngredientUnit {
    pub name: String,
    pub plural_name: Option<String>,
    pub abbreviation: Option<String>,
}

impl IngredientUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            plural_name: None,
            abbreviation: None,
        }
    }

    /// Label used for display: the plural form when the quantity calls for it.
    pub fn label_for(&self, quantity: f64) -> &str {
        match &self.plural_name {
            Some(plural) if quantity > 1.0 && !plural.is_empty() => plural,
            _ => &self.name,
        }
    }
}

/// One line of a recipe's ingredient list.
///
/// `order_index` is zero-based and dense within the owning recipe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub order_index: u32,
    pub name: String,
    pub quantity: f64,
    pub unit: IngredientUnit,
    pub original_text: String,
    pub note: String,
    /// Section heading for a run of contiguous ingredients.
    pub title: Option<String>,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            order_index: 0,
            name: name.into(),
            quantity: quantity.max(0.0),
            unit: IngredientUnit::new(unit),
            original_text: String::new(),
            note: String::new(),
            title: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn with_original_text(mut self, text: impl Into<String>) -> Self {
        self.original_text = text.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.unit.label_for(self.quantity);
        match (self.quantity > 0.0, unit.is_empty()) {
            (true, true) => write!(f, "{} {}", self.quantity, self.name)?,
            (true, false) => write!(f, "{} {} {}", self.quantity, unit, self.name)?,
            (false, _) => write!(f, "{}", self.name)?,
        }
        if !self.note.is_empty() {
            write!(f, ", {}", self.note)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingredient_new() {
        let ingredient = Ingredient::new("flour", 2.5, "cups");
        assert_eq!(ingredient.name, "flour");
        assert_eq!(ingredient.quantity, 2.5);
        assert_eq!(ingredient.unit.name, "cups");
        assert_eq!(ingredient.order_index, 0);
    }

    #[test]
    fn test_negative_quantity_clamped() {
        let ingredient = Ingredient::new("salt", -1.0, "pinch");
        assert_eq!(ingredient.quantity, 0.0);
    }

    #[test]
    fn test_ingredient_display() {
        let ingredient = Ingredient::new("flour", 2.5, "cups");
        assert_eq!(format!("{}", ingredient), "2.5 cups flour");
    }

    #[test]
    fn test_ingredient_display_no_unit() {
        let ingredient = Ingredient::new("eggs", 3.0, "");
        assert_eq!(format!("{}", ingredient), "3 eggs");
    }

    #[test]
    fn test_ingredient_display_no_quantity_with_note() {
        let ingredient = Ingredient::new("salt", 0.0, "").with_note("to taste");
        assert_eq!(format!("{}", ingredient), "salt, to taste");
    }

    #[test]
    fn test_plural_unit_label() {
        let mut unit = IngredientUnit::new("cup");
        unit.plural_name = Some("cups".to_string());
        assert_eq!(unit.label_for(1.0), "cup");
        assert_eq!(unit.label_for(2.0), "cups");
    }
}
