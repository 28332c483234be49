use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub driver_id: Uuid,
    pub amount: f64,
    pub eta_minutes: i64,
    pub status: Status,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Active,
    Accepted,
    Rejected,
    Expired,
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Active => "active".into(),
            Self::Accepted => "accepted".into(),
            Self::Rejected => "rejected".into(),
            Self::Expired => "expired".into(),
        }
    }
}

/// Checks the caller-supplied parts of a bid before anything is locked.
pub fn validate_offer(amount: f64, eta_minutes: i64) -> Result<(), Error> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::invalid_request_error("bid amount must be positive"));
    }

    if eta_minutes <= 0 {
        return Err(Error::invalid_request_error("bid eta must be positive"));
    }

    Ok(())
}

impl Bid {
    pub fn new(
        booking_id: Uuid,
        driver_id: Uuid,
        amount: f64,
        eta_minutes: i64,
        expires_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            driver_id,
            amount,
            eta_minutes,
            status: Status::Active,
            expires_at,
            created_at,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    /// Cheapest first, faster arrival breaks price ties.
    pub fn rank(&self, other: &Bid) -> Ordering {
        self.amount
            .total_cmp(&other.amount)
            .then_with(|| self.eta_minutes.cmp(&other.eta_minutes))
    }

    pub fn accept(&mut self) -> Result<(), Error> {
        self.transition(Status::Accepted)
    }

    pub fn reject(&mut self) -> Result<(), Error> {
        self.transition(Status::Rejected)
    }

    pub fn expire(&mut self) -> Result<(), Error> {
        self.transition(Status::Expired)
    }

    fn transition(&mut self, to: Status) -> Result<(), Error> {
        match self.status {
            Status::Active => {
                self.status = to;
                Ok(())
            }
            _ => Err(Error::conflict_error("bid is no longer active")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bid(amount: f64, eta_minutes: i64) -> Bid {
        Bid::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            amount,
            eta_minutes,
            Utc::now(),
            Utc::now(),
        )
    }

    #[test]
    fn rank_orders_by_price_then_eta() {
        let a = bid(300.0, 10);
        let b = bid(280.0, 15);
        let c = bid(280.0, 5);

        let mut bids = vec![a.clone(), b.clone(), c.clone()];
        bids.sort_by(Bid::rank);

        let ids: Vec<Uuid> = bids.iter().map(|bid| bid.id).collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);
    }

    #[test]
    fn only_active_bids_transition() {
        let mut b = bid(100.0, 4);
        b.accept().unwrap();
        assert_eq!(b.status, Status::Accepted);

        assert!(b.reject().unwrap_err().is_conflict_error());
        assert!(b.expire().unwrap_err().is_conflict_error());
        assert_eq!(b.status, Status::Accepted);
    }

    #[test]
    fn offer_validation() {
        assert!(validate_offer(250.0, 7).is_ok());
        assert!(validate_offer(0.0, 7).unwrap_err().is_invalid_request_error());
        assert!(validate_offer(-5.0, 7).unwrap_err().is_invalid_request_error());
        assert!(validate_offer(f64::NAN, 7).unwrap_err().is_invalid_request_error());
        assert!(validate_offer(250.0, 0).unwrap_err().is_invalid_request_error());
    }
}
