// marquee-core/src/tools.rs

//! The tool catalog advertised to the model and the dispatch from a requested
//! tool name to the matching [`catalog`](crate::catalog) lookup.

use crate::catalog::{self, CatalogError, MovieId};
use crate::models::tools::{ToolDefinition, ToolParameter, ToolParametersDefinition};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, trace};

/// Errors raised while executing a catalog tool.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid arguments for tool '{tool}': {source}")]
    InvalidArguments {
        tool: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Failed to serialize result of tool '{tool}': {source}")]
    Serialize {
        tool: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Every tool the model may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogTool {
    UserPastReviews,
    Genres,
    Movies,
}

impl CatalogTool {
    pub const ALL: [CatalogTool; 3] = [
        CatalogTool::UserPastReviews,
        CatalogTool::Genres,
        CatalogTool::Movies,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CatalogTool::UserPastReviews => "get_user_past_reviews",
            CatalogTool::Genres => "get_genres",
            CatalogTool::Movies => "get_movies",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// Definitions for the whole catalog, in a stable order.
    pub fn definitions() -> Vec<ToolDefinition> {
        Self::ALL.iter().map(CatalogTool::definition).collect()
    }

    pub fn definition(&self) -> ToolDefinition {
        let (description, properties) = match self {
            CatalogTool::UserPastReviews => (
                "Get user past reviews for a movie",
                vec![(
                    "user_id",
                    ToolParameter::string("The user ID to fetch reviews for past watched movies"),
                )],
            ),
            CatalogTool::Genres => (
                "Get genres for the list of movies",
                vec![(
                    "movie_ids",
                    ToolParameter::string_array("List of movie IDs to fetch genres for"),
                )],
            ),
            CatalogTool::Movies => (
                "Get movies based on genre ids which user likes and has not watched it yet",
                vec![
                    (
                        "genres",
                        ToolParameter::string_array("List of genres to fetch movies for"),
                    ),
                    (
                        "watched_movie_ids",
                        ToolParameter::string_array("List of passed movie ids user has watched"),
                    ),
                ],
            ),
        };

        let required = properties.iter().map(|(key, _)| key.to_string()).collect();
        let properties: BTreeMap<String, ToolParameter> = properties
            .into_iter()
            .map(|(key, param)| (key.to_string(), param))
            .collect();

        ToolDefinition {
            name: self.name().to_string(),
            description: description.to_string(),
            parameters: ToolParametersDefinition {
                param_type: "object".to_string(),
                properties,
                required,
            },
        }
    }

    /// Runs the lookup with JSON-encoded `arguments` and returns the result as JSON text.
    pub fn execute(&self, arguments: &str) -> Result<String, ToolError> {
        debug!(tool = self.name(), "Executing catalog tool.");
        trace!(tool = self.name(), arguments = %arguments, "Raw tool arguments");

        let result = match self {
            CatalogTool::UserPastReviews => {
                let args: PastReviewsArgs = self.parse_args(arguments)?;
                self.to_json(&catalog::past_reviews(&args.user_id)?)?
            }
            CatalogTool::Genres => {
                let args: GenresArgs = self.parse_args(arguments)?;
                let ids = movie_ids(&args.movie_ids);
                self.to_json(&catalog::genres(&ids))?
            }
            CatalogTool::Movies => {
                let args: MoviesArgs = self.parse_args(arguments)?;
                let watched = movie_ids(&args.watched_movie_ids);
                self.to_json(&catalog::candidate_movies(&args.genres, &watched))?
            }
        };

        trace!(tool = self.name(), output = %result, "Tool output");
        Ok(result)
    }

    fn parse_args<T: DeserializeOwned>(&self, arguments: &str) -> Result<T, ToolError> {
        // Some models send an empty string instead of "{}".
        let arguments = if arguments.trim().is_empty() {
            "{}"
        } else {
            arguments
        };
        serde_json::from_str(arguments).map_err(|source| ToolError::InvalidArguments {
            tool: self.name(),
            source,
        })
    }

    fn to_json<T: serde::Serialize>(&self, value: &T) -> Result<String, ToolError> {
        serde_json::to_string(value).map_err(|source| ToolError::Serialize {
            tool: self.name(),
            source,
        })
    }
}

#[derive(Deserialize, Debug)]
struct PastReviewsArgs {
    user_id: String,
}

#[derive(Deserialize, Debug)]
struct GenresArgs {
    movie_ids: Vec<MovieIdArg>,
}

#[derive(Deserialize, Debug)]
struct MoviesArgs {
    genres: Vec<String>,
    watched_movie_ids: Vec<MovieIdArg>,
}

/// The schema advertises ids as strings, but models also send bare numbers.
/// Anything else (negative, fractional or out-of-range numbers, objects) is kept
/// so that it can be ignored like any other unknown id.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum MovieIdArg {
    Number(u32),
    Text(String),
    Other(serde_json::Value),
}

impl MovieIdArg {
    fn movie_id(&self) -> Option<MovieId> {
        match self {
            MovieIdArg::Number(id) => Some(MovieId(*id)),
            MovieIdArg::Text(text) => text.trim().parse().ok().map(MovieId),
            MovieIdArg::Other(_) => None,
        }
    }
}

// Non-numeric ids cannot match any catalog entry, so they are dropped here.
fn movie_ids(args: &[MovieIdArg]) -> Vec<MovieId> {
    args.iter().filter_map(MovieIdArg::movie_id).collect()
}
