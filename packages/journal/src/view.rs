//! Navigation state as a value.
//!
//! A `View` names the screen being shown and the records it is about. It is
//! replaced, never mutated, as the user navigates.

use crate::model::Dataset;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Days,
    Day {
        day_id: String,
    },
    Exercise {
        day_id: String,
        exercise_id: String,
    },
    MealTypes,
    MealType {
        meal_type_id: String,
    },
    Meal {
        meal_type_id: String,
        meal_id: String,
    },
    Progress,
}

impl View {
    pub fn day(day_id: impl Into<String>) -> Self {
        View::Day {
            day_id: day_id.into(),
        }
    }

    pub fn exercise(day_id: impl Into<String>, exercise_id: impl Into<String>) -> Self {
        View::Exercise {
            day_id: day_id.into(),
            exercise_id: exercise_id.into(),
        }
    }

    pub fn meal_type(meal_type_id: impl Into<String>) -> Self {
        View::MealType {
            meal_type_id: meal_type_id.into(),
        }
    }

    pub fn meal(meal_type_id: impl Into<String>, meal_id: impl Into<String>) -> Self {
        View::Meal {
            meal_type_id: meal_type_id.into(),
            meal_id: meal_id.into(),
        }
    }

    /// The enclosing screen. Top-level screens are their own parent.
    pub fn back(&self) -> View {
        match self {
            View::Day { .. } => View::Days,
            View::Exercise { day_id, .. } => View::day(day_id.clone()),
            View::MealType { .. } => View::MealTypes,
            View::Meal { meal_type_id, .. } => View::meal_type(meal_type_id.clone()),
            top => top.clone(),
        }
    }

    /// Whether every record this view names exists in `dataset`.
    pub fn is_valid(&self, dataset: &Dataset) -> bool {
        match self {
            View::Days | View::MealTypes | View::Progress => true,
            View::Day { day_id } => dataset.day(day_id).is_some(),
            View::Exercise {
                day_id,
                exercise_id,
            } => {
                dataset.day(day_id).is_some()
                    && dataset
                        .exercise(exercise_id)
                        .is_some_and(|e| e.day_id.as_deref() == Some(day_id.as_str()))
            }
            View::MealType { meal_type_id } => dataset.meal_type(meal_type_id).is_some(),
            View::Meal {
                meal_type_id,
                meal_id,
            } => {
                dataset.meal_type(meal_type_id).is_some()
                    && dataset
                        .meal(meal_id)
                        .is_some_and(|m| m.meal_type_id.as_deref() == Some(meal_type_id.as_str()))
            }
        }
    }

    /// The nearest view, this one or an ancestor, that is still valid.
    pub fn revalidate(&self, dataset: &Dataset) -> View {
        let mut view = self.clone();
        while !view.is_valid(dataset) {
            view = view.back();
        }
        view
    }
}
