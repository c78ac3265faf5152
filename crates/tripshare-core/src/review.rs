//! Reviews and the running-mean rating they feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 5.0;

pub fn validate_rating(rating: f64) -> Result<f64> {
  if rating.is_finite() && (MIN_RATING..=MAX_RATING).contains(&rating) {
    Ok(rating)
  } else {
    Err(Error::InvalidRating(rating))
  }
}

// ─── Aggregate ───────────────────────────────────────────────────────────────

/// The mean rating of a user over all their live reviews.
///
/// No rounding is applied. With no reviews the rating is exactly zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RatingAggregate {
  pub rating:            f64,
  pub number_of_reviews: u32,
}

impl RatingAggregate {
  fn total(self) -> f64 { self.rating * f64::from(self.number_of_reviews) }

  /// Fold in a new review.
  pub fn with_review(self, rating: f64) -> Self {
    let number_of_reviews = self.number_of_reviews.saturating_add(1);
    Self {
      rating: (self.total() + rating) / f64::from(number_of_reviews),
      number_of_reviews,
    }
  }

  /// Replace one review's rating with another; the count is unchanged.
  pub fn with_revision(self, old_rating: f64, new_rating: f64) -> Self {
    if self.number_of_reviews == 0 {
      return self;
    }
    Self {
      rating: (self.total() - old_rating + new_rating)
        / f64::from(self.number_of_reviews),
      ..self
    }
  }

  /// Take a deleted review back out.
  pub fn without_review(self, rating: f64) -> Self {
    let number_of_reviews = self.number_of_reviews.saturating_sub(1);
    if number_of_reviews == 0 {
      return Self::default();
    }
    Self {
      rating: (self.total() - rating) / f64::from(number_of_reviews),
      number_of_reviews,
    }
  }
}

// ─── Review ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
  pub review_id:        Uuid,
  pub reviewed_user_id: Uuid,
  pub reviewer_id:      Uuid,
  /// The trip the review refers to, if any.
  pub proposal_id:      Option<Uuid>,
  pub rating:           f64,
  pub comment:          String,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

/// Input to [`crate::store::TripStore::add_review`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
  pub reviewed_user_id: Uuid,
  pub reviewer_id:      Uuid,
  #[serde(default)]
  pub proposal_id:      Option<Uuid>,
  pub rating:           f64,
  #[serde(default)]
  pub comment:          String,
}

impl NewReview {
  pub fn new(reviewed_user_id: Uuid, reviewer_id: Uuid, rating: f64) -> Self {
    Self {
      reviewed_user_id,
      reviewer_id,
      proposal_id: None,
      rating,
      comment: String::new(),
    }
  }

  pub fn into_review(self, now: DateTime<Utc>) -> Result<Review> {
    if self.reviewed_user_id == self.reviewer_id {
      return Err(Error::SelfReview(self.reviewer_id));
    }
    Ok(Review {
      review_id:        Uuid::new_v4(),
      reviewed_user_id: self.reviewed_user_id,
      reviewer_id:      self.reviewer_id,
      proposal_id:      self.proposal_id,
      rating:           validate_rating(self.rating)?,
      comment:          self.comment,
      created_at:       now,
      updated_at:       now,
    })
  }
}

/// Input to [`crate::store::TripStore::update_review`]. The previous rating is
/// taken from the stored review.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewUpdate {
  pub rating:  f64,
  pub comment: Option<String>,
}
