//! Owning records and the full dataset snapshot.
//!
//! Field names on the wire are camelCase to stay readable by older exports.
//! Every field is defaulted so partially filled documents still load.

use serde::{Deserialize, Serialize};

use crate::media::reference::{HasMedia, MediaRef, entries};

/// Records addressed by an opaque id.
pub trait Identified {
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
}

macro_rules! identified {
    ($($ty:ty),+ $(,)?) => {
        $(impl Identified for $ty {
            fn id(&self) -> &str {
                &self.id
            }
            fn set_id(&mut self, id: String) {
                self.id = id;
            }
        })+
    };
}

macro_rules! has_media {
    ($($ty:ty),+ $(,)?) => {
        $(impl HasMedia for $ty {
            fn media(&self) -> &[MediaRef] {
                &self.media
            }
            fn media_mut(&mut self) -> &mut Vec<MediaRef> {
                &mut self.media
            }
        })+
    };
}

/// A workout day, parent of exercises.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Day {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub day_id: Option<String>,
    #[serde(default)]
    pub name: String,
    /// Short note shown in the list.
    #[serde(default)]
    pub notes: String,
    /// Long-form notes on the exercise screen.
    #[serde(default)]
    pub notes_long: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, with = "entries")]
    pub media: Vec<MediaRef>,
    #[serde(default)]
    pub created_at: i64,
}

/// A meal category, parent of meals.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealType {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub meal_type_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, with = "entries")]
    pub media: Vec<MediaRef>,
    #[serde(default)]
    pub created_at: i64,
}

/// The three photo angles of a progress entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoSlot {
    Front,
    Side,
    Back,
}

impl PhotoSlot {
    pub const ALL: [PhotoSlot; 3] = [PhotoSlot::Front, PhotoSlot::Side, PhotoSlot::Back];
}

impl std::fmt::Display for PhotoSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PhotoSlot::Front => "front",
            PhotoSlot::Side => "side",
            PhotoSlot::Back => "back",
        })
    }
}

/// Media ids of a progress entry's photos. Empty ids count as absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressPhotos {
    #[serde(default)]
    pub front: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub back: Option<String>,
}

impl ProgressPhotos {
    pub fn get(&self, slot: PhotoSlot) -> Option<&str> {
        match slot {
            PhotoSlot::Front => self.front.as_deref(),
            PhotoSlot::Side => self.side.as_deref(),
            PhotoSlot::Back => self.back.as_deref(),
        }
        .filter(|id| !id.is_empty())
    }

    pub fn slot_mut(&mut self, slot: PhotoSlot) -> &mut Option<String> {
        match slot {
            PhotoSlot::Front => &mut self.front,
            PhotoSlot::Side => &mut self.side,
            PhotoSlot::Back => &mut self.back,
        }
    }

    /// Populated media ids in slot order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        PhotoSlot::ALL.into_iter().filter_map(|slot| self.get(slot))
    }
}

/// One body-weight measurement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    #[serde(default)]
    pub id: String,
    /// Calendar date, `YYYY-MM-DD`.
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub photos: ProgressPhotos,
}

identified!(Day, Exercise, MealType, Meal, ProgressEntry);
has_media!(Exercise, Meal);

/// Snapshot of every owning-record collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub days: Vec<Day>,
    pub exercises: Vec<Exercise>,
    pub meal_types: Vec<MealType>,
    pub meals: Vec<Meal>,
    pub progress: Vec<ProgressEntry>,
}

impl Dataset {
    pub fn day(&self, id: &str) -> Option<&Day> {
        self.days.iter().find(|d| d.id == id)
    }

    pub fn exercise(&self, id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    pub fn meal_type(&self, id: &str) -> Option<&MealType> {
        self.meal_types.iter().find(|t| t.id == id)
    }

    pub fn meal(&self, id: &str) -> Option<&Meal> {
        self.meals.iter().find(|m| m.id == id)
    }

    pub fn progress_entry(&self, id: &str) -> Option<&ProgressEntry> {
        self.progress.iter().find(|p| p.id == id)
    }

    /// Exercises of one day, in creation order.
    pub fn exercises_of<'a>(&'a self, day_id: &'a str) -> impl Iterator<Item = &'a Exercise> {
        self.exercises
            .iter()
            .filter(move |e| e.day_id.as_deref() == Some(day_id))
    }

    /// Meals of one meal type, in creation order.
    pub fn meals_of<'a>(&'a self, meal_type_id: &'a str) -> impl Iterator<Item = &'a Meal> {
        self.meals
            .iter()
            .filter(move |m| m.meal_type_id.as_deref() == Some(meal_type_id))
    }

    /// Every media list held by an owning record.
    pub fn media_lists(&self) -> impl Iterator<Item = &[MediaRef]> {
        self.exercises
            .iter()
            .map(|e| e.media())
            .chain(self.meals.iter().map(|m| m.media()))
    }

    pub fn media_lists_mut(&mut self) -> impl Iterator<Item = &mut Vec<MediaRef>> {
        self.exercises
            .iter_mut()
            .map(|e| &mut e.media)
            .chain(self.meals.iter_mut().map(|m| &mut m.media))
    }
}
