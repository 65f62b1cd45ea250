//! Movie catalogue payloads, listing filters, and review drafts.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ApiError;

/// Shortest review body accepted for submission.
pub const REVIEW_BODY_MIN_CHARS: usize = 10;
/// Lowest accepted review rating.
pub const REVIEW_RATING_MIN: u8 = 1;
/// Highest accepted review rating.
pub const REVIEW_RATING_MAX: u8 = 10;

/// One review attached to a movie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Server identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Review text.
    pub body: String,
    /// Rating given by the reviewer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    /// Creation time as sent by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update as sent by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Author identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Movie the review belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie_id: Option<String>,
}

/// Catalogue entry.
///
/// The backend DTO uses `genre`, `backdrop` and `reviewIds`; those names are
/// accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    /// IMDb identifier, also the path segment for `GET /movies/{id}`.
    #[serde(rename = "imdbID", alias = "imdbId")]
    pub imdb_id: String,
    /// Title.
    pub title: String,
    /// Release date as sent by the server.
    #[serde(default)]
    pub release_date: String,
    /// Trailer URL.
    #[serde(default)]
    pub trailer_link: String,
    /// Poster URL.
    #[serde(default)]
    pub poster: String,
    /// Genre names.
    #[serde(default, alias = "genre")]
    pub genres: Vec<String>,
    /// Backdrop image URLs.
    #[serde(default, alias = "backdrop")]
    pub backdrops: Vec<String>,
    /// Reviews attached to the movie.
    #[serde(default, alias = "reviewIds")]
    pub reviews: Vec<Review>,
    /// Plot summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
    /// Director.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    /// Cast members.
    #[serde(default)]
    pub cast: Vec<String>,
    /// Aggregate rating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Running time as sent by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

/// Sort key for movie listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    /// Alphabetical by title.
    Title,
    /// By release date.
    ReleaseDate,
    /// By aggregate rating.
    Rating,
}

impl SortBy {
    /// Query-string value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::ReleaseDate => "releaseDate",
            Self::Rating => "rating",
        }
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "title" => Ok(Self::Title),
            "releaseDate" | "release-date" => Ok(Self::ReleaseDate),
            "rating" => Ok(Self::Rating),
            other => Err(format!(
                "unknown sort key `{other}`; expected title, releaseDate, or rating"
            )),
        }
    }
}

/// Sort direction for movie listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl SortOrder {
    /// Query-string value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort order `{other}`; expected asc or desc")),
        }
    }
}

/// Optional filters for `GET /movies`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieFilters {
    /// Genre name.
    pub genre: Option<String>,
    /// Release year.
    pub year: Option<u16>,
    /// Minimum rating.
    pub rating: Option<f64>,
    /// Free-text search.
    pub search: Option<String>,
    /// Sort key.
    pub sort_by: Option<SortBy>,
    /// Sort direction.
    pub sort_order: Option<SortOrder>,
}

impl MovieFilters {
    /// Render the filters as query pairs, skipping absent or blank values.
    ///
    /// # Examples
    /// ```
    /// use movies_client::domain::{MovieFilters, SortBy};
    ///
    /// let filters = MovieFilters {
    ///     genre: Some("Drama".into()),
    ///     search: Some("  ".into()),
    ///     sort_by: Some(SortBy::ReleaseDate),
    ///     ..MovieFilters::default()
    /// };
    /// assert_eq!(
    ///     filters.to_query_pairs(),
    ///     vec![
    ///         ("genre".to_owned(), "Drama".to_owned()),
    ///         ("sortBy".to_owned(), "releaseDate".to_owned()),
    ///     ]
    /// );
    /// ```
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let candidates = [
            ("genre", self.genre.clone()),
            ("year", self.year.map(|year| year.to_string())),
            ("rating", self.rating.map(|rating| rating.to_string())),
            ("search", self.search.clone()),
            ("sortBy", self.sort_by.map(|key| key.as_str().to_owned())),
            (
                "sortOrder",
                self.sort_order.map(|order| order.as_str().to_owned()),
            ),
        ];
        candidates
            .into_iter()
            .filter_map(|(key, value)| {
                value
                    .map(|v| v.trim().to_owned())
                    .filter(|v| !v.is_empty())
                    .map(|v| (key.to_owned(), v))
            })
            .collect()
    }
}

/// Review about to be submitted with `POST /reviews`.
///
/// ## Invariants
/// - `body` is trimmed and at least [`REVIEW_BODY_MIN_CHARS`] characters.
/// - `rating`, when present, lies in
///   [`REVIEW_RATING_MIN`]..=[`REVIEW_RATING_MAX`].
/// - `movie_id` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDraft {
    body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rating: Option<u8>,
    movie_id: String,
}

impl ReviewDraft {
    /// Validate form input; failures are `Validation` errors naming the field.
    pub fn try_new(movie_id: &str, body: &str, rating: Option<u8>) -> Result<Self, ApiError> {
        let movie_id = movie_id.trim();
        if movie_id.is_empty() {
            return Err(ApiError::validation("movieId", "Movie is required"));
        }

        let body = body.trim();
        if body.is_empty() {
            return Err(ApiError::validation("body", "Review cannot be empty"));
        }
        if body.chars().count() < REVIEW_BODY_MIN_CHARS {
            return Err(ApiError::validation(
                "body",
                format!("Review must be at least {REVIEW_BODY_MIN_CHARS} characters"),
            ));
        }

        if let Some(value) = rating {
            if !(REVIEW_RATING_MIN..=REVIEW_RATING_MAX).contains(&value) {
                return Err(ApiError::validation(
                    "rating",
                    format!("Rating must be between {REVIEW_RATING_MIN} and {REVIEW_RATING_MAX}"),
                ));
            }
        }

        Ok(Self {
            body: body.to_owned(),
            rating,
            movie_id: movie_id.to_owned(),
        })
    }

    /// Review text.
    pub fn body(&self) -> &str {
        self.body.as_str()
    }

    /// Optional rating.
    pub fn rating(&self) -> Option<u8> {
        self.rating
    }

    /// Target movie identifier.
    pub fn movie_id(&self) -> &str {
        self.movie_id.as_str()
    }
}
