//! Catalogue and review endpoints over the request pipeline.

use std::sync::Arc;

use tracing::debug;

use super::envelope::{Expectation, decode_data};
use super::error::{ApiError, codes};
use super::http_pipeline::HttpPipeline;
use super::ports::ApiRequest;
use super::{Movie, MovieFilters, Review, ReviewDraft};

const LIST: Expectation = Expectation::lenient(codes::MOVIES_FETCH_ERROR, "Failed to fetch movies");
const FETCH: Expectation = Expectation::lenient(codes::MOVIE_FETCH_ERROR, "Failed to fetch movie");
const SUBMIT: Expectation =
    Expectation::lenient(codes::REVIEW_SUBMIT_ERROR, "Failed to submit review");

/// Movie catalogue client.
#[derive(Clone)]
pub struct MovieService {
    pipeline: Arc<HttpPipeline>,
}

impl MovieService {
    /// Build the service over a shared pipeline.
    pub fn new(pipeline: Arc<HttpPipeline>) -> Self {
        Self { pipeline }
    }

    /// `GET /movies` with `filters` as the query string.
    pub async fn list_movies(&self, filters: &MovieFilters) -> Result<Vec<Movie>, ApiError> {
        let request = ApiRequest::get("/movies").with_query(filters.to_query_pairs());
        let response = self.pipeline.send(request).await?;
        let movies: Vec<Movie> = decode_data(&response, LIST)?;
        debug!(count = movies.len(), "movies listed");
        Ok(movies)
    }

    /// `GET /movies/{id}`.
    pub async fn get_movie(&self, imdb_id: &str) -> Result<Movie, ApiError> {
        let id = path_segment(imdb_id)?;
        let response = self.pipeline.send(ApiRequest::get(format!("/movies/{id}"))).await?;
        decode_data(&response, FETCH)
    }

    /// `POST /reviews`.
    pub async fn submit_review(&self, draft: &ReviewDraft) -> Result<Review, ApiError> {
        let body = serde_json::to_value(draft).map_err(|error| {
            ApiError::validation("body", format!("review not encodable: {error}"))
        })?;
        let response = self
            .pipeline
            .send(ApiRequest::post("/reviews").with_json(body))
            .await?;
        decode_data(&response, SUBMIT)
    }
}

fn path_segment(raw: &str) -> Result<&str, ApiError> {
    let id = raw.trim();
    let malformed = id.is_empty()
        || id
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '%'));
    if malformed {
        return Err(ApiError::validation(
            "movieId",
            "Movie id must be a single non-empty path segment",
        ));
    }
    Ok(id)
}
