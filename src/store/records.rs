//! Read path of the student and documentation collections.

use std::fmt;

use futures::try_join;
use log::info;

use crate::store::{DOCUMENTATION_TABLE, STUDENT_TABLE, TransportError, requester::Requester};

/// Aggregate counts shown on the statistics screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statistics {
    pub students: usize,
    pub documentation: usize,
    pub active_emergencies: usize,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "students: {}, documentation entries: {}, active emergencies: {}",
            self.students, self.documentation, self.active_emergencies
        )
    }
}

/// Counts the records of both collections concurrently.
///
/// # Arguments
///
/// * `requester` - An implementation of the [Requester] trait to interact with the store.
/// * `active_emergencies` - Number of active emergencies, taken from the alert snapshot
///   instead of a third request.
///
/// # Returns
///
/// The [`Statistics`], or the first [`TransportError`] raised by either request.
pub async fn load_statistics<R: Requester>(
    requester: &R,
    active_emergencies: usize,
) -> Result<Statistics, TransportError> {
    info!("request statistics");
    let (students, documentation) = try_join!(
        requester.list_records(STUDENT_TABLE),
        requester.list_records(DOCUMENTATION_TABLE)
    )?;

    Ok(Statistics {
        students: students.len(),
        documentation: documentation.len(),
        active_emergencies,
    })
}
