//! User profiles: the applicant / organizer / reviewee record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::review::RatingAggregate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
  pub user_id:           Uuid,
  pub display_name:      String,
  /// Mean of all live reviews of this user; `0.0` when there are none.
  pub rating:            f64,
  pub number_of_reviews: u32,
  /// Applications this user has submitted and not withdrawn.
  pub application_ids:   Vec<Uuid>,
  pub created_at:        DateTime<Utc>,
}

impl UserProfile {
  pub fn aggregate(&self) -> RatingAggregate {
    RatingAggregate {
      rating:            self.rating,
      number_of_reviews: self.number_of_reviews,
    }
  }

  pub fn set_aggregate(&mut self, aggregate: RatingAggregate) {
    self.rating = aggregate.rating;
    self.number_of_reviews = aggregate.number_of_reviews;
  }
}

/// Input to [`crate::store::TripStore::add_user`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
  pub display_name: String,
}

impl NewUser {
  pub fn new(display_name: impl Into<String>) -> Self {
    Self { display_name: display_name.into() }
  }

  pub fn into_profile(self, now: DateTime<Utc>) -> UserProfile {
    UserProfile {
      user_id:           Uuid::new_v4(),
      display_name:      self.display_name,
      rating:            0.0,
      number_of_reviews: 0,
      application_ids:   Vec::new(),
      created_at:        now,
    }
  }
}
