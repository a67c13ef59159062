// marquee-core/src/catalog.rs

//! Fixed in-memory lookup tables standing in for a user, review and movie
//! database. Every lookup is a linear scan.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Numeric movie identifier.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct MovieId(pub u32);

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A review a user left for a movie they watched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PastReview {
    /// Movie title.
    pub movie: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<MovieId>,
    pub review: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("No reviews found for user '{user_id}'")]
    NotFound { user_id: String },
}

type ReviewRow = (&'static str, Option<u32>, &'static str);

const REVIEWS: &[(&str, &[ReviewRow])] = &[
    (
        "user1",
        &[
            ("Inception", Some(101), "Amazing plot and visuals!"),
            ("The Matrix", Some(102), "A mind-bending experience."),
            (
                "Jurassic Park",
                Some(103),
                "One time watch movie. Wont watch it again",
            ),
            ("Godfather", Some(104), "Boring movie"),
        ],
    ),
    (
        "user2",
        &[
            ("Titanic", None, "A heartbreaking love story."),
            ("Avatar", None, "Stunning world-building and effects."),
        ],
    ),
];

const GENRES: &[(u32, &[&str])] = &[
    (101, &["Sci-Fi", "Thriller"]),
    (102, &["Sci-Fi", "Action"]),
    (103, &["Adventure"]),
    (104, &["Crime", "Drama"]),
    (201, &["Romance", "Drama"]),
    (202, &["Sci-Fi", "Adventure"]),
];

const MOVIES_BY_GENRE: &[(&str, &[(u32, &str)])] = &[
    ("Sci-Fi", &[(201, "Interstellar"), (202, "The Martian")]),
    (
        "Adventure",
        &[(203, "Avatar"), (204, "Guardians of the Galaxy")],
    ),
    (
        "Thriller",
        &[
            (205, "Tenet"),
            (101, "Inception"),
            (102, "The Matrix"),
            (208, "Edge of Tomorrow"),
        ],
    ),
    ("Crime", &[(209, "Pulp Fiction"), (210, "The Dark Knight")]),
];

/// Returns every review recorded for `user_id`.
pub fn past_reviews(user_id: &str) -> Result<Vec<PastReview>, CatalogError> {
    let (_, rows) = REVIEWS
        .iter()
        .find(|(user, _)| *user == user_id)
        .ok_or_else(|| CatalogError::NotFound {
            user_id: user_id.to_string(),
        })?;

    Ok(rows
        .iter()
        .map(|(movie, id, review)| PastReview {
            movie: movie.to_string(),
            id: id.map(MovieId),
            review: review.to_string(),
        })
        .collect())
}

/// Union of the genres of every known id. Unknown ids are ignored.
pub fn genres(movie_ids: &[MovieId]) -> BTreeSet<String> {
    movie_ids
        .iter()
        .filter_map(|movie_id| GENRES.iter().find(|(id, _)| *id == movie_id.0))
        .flat_map(|(_, labels)| labels.iter().map(|label| label.to_string()))
        .collect()
}

/// Titles for each genre, in the order the genres are given, skipping
/// `excluded` ids. A title listed under several genres appears once per genre.
pub fn candidate_movies(genres: &[String], excluded: &[MovieId]) -> Vec<String> {
    genres
        .iter()
        .filter_map(|genre| MOVIES_BY_GENRE.iter().find(|(name, _)| *name == genre.as_str()))
        .flat_map(|(_, movies)| movies.iter())
        .filter(|(id, _)| !excluded.contains(&MovieId(*id)))
        .map(|(_, title)| title.to_string())
        .collect()
}
