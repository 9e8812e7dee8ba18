use serde::{Deserialize, Serialize};

use crate::domain::request::MaterialRequest;
use crate::domain::status::RequestStatus;

/// Dashboard counters over the requests visible to a caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub fulfilled: usize,
}

impl RequestStats {
    pub fn tally<'a, I>(requests: I) -> Self
    where
        I: IntoIterator<Item = &'a MaterialRequest>,
    {
        requests.into_iter().fold(Self::default(), |mut stats, request| {
            stats.total += 1;
            match request.status {
                RequestStatus::Pending => stats.pending += 1,
                RequestStatus::Approved => stats.approved += 1,
                RequestStatus::Rejected => stats.rejected += 1,
                RequestStatus::Fulfilled => stats.fulfilled += 1,
            }
            stats
        })
    }
}
