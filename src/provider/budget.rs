use super::error::Error;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Cost ceiling shared by every call made through one client.
///
/// A call reserves its estimated cost before it is sent and settles the
/// reservation with the actual cost afterwards, so concurrent calls see each
/// other's pending spend.
#[derive(Debug)]
pub struct BudgetGuard {
    ceiling_usd: f64,
    ledger: Mutex<Ledger>,
}

#[derive(Debug, Default)]
struct Ledger {
    spent: f64,
    reserved: f64,
    /// Most expensive settled call. Floors estimates when pricing is unknown.
    largest_call: f64,
}

impl BudgetGuard {
    #[must_use]
    pub fn new(ceiling_usd: f64) -> Self {
        Self {
            ceiling_usd,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn ceiling(&self) -> f64 {
        self.ceiling_usd
    }

    /// Settled spend, excluding calls still in flight.
    #[must_use]
    pub fn spent(&self) -> f64 {
        self.ledger().spent
    }

    /// Spend held by calls that have not settled yet.
    #[must_use]
    pub fn reserved(&self) -> f64 {
        self.ledger().reserved
    }

    /// Hold `estimate_usd` against the ceiling until the call settles.
    ///
    /// The held amount is at least the most expensive call seen so far, so a
    /// zero estimate from missing pricing still counts. On refusal `spent`
    /// in the error includes in-flight reservations.
    pub fn reserve(&self, estimate_usd: f64) -> Result<Reservation<'_>, Error> {
        let mut ledger = self.ledger();
        let amount = estimate_usd.max(ledger.largest_call);
        let committed = ledger.spent + ledger.reserved;
        if committed + amount > self.ceiling_usd {
            return Err(Error::BudgetExceeded {
                spent: committed,
                estimate: amount,
                ceiling: self.ceiling_usd,
            });
        }
        ledger.reserved += amount;
        Ok(Reservation {
            guard: self,
            amount,
            settled: false,
        })
    }

    fn release(&self, amount: f64, actual_usd: Option<f64>) {
        let mut ledger = self.ledger();
        ledger.reserved = (ledger.reserved - amount).max(0.0);
        if let Some(cost) = actual_usd {
            ledger.spent += cost;
            ledger.largest_call = ledger.largest_call.max(cost);
        }
    }
}

/// Pending spend for one call. Dropping it without [`settle`](Self::settle)
/// releases the hold, which is what a failed call does.
#[derive(Debug)]
#[must_use = "dropping a reservation releases it immediately"]
pub struct Reservation<'a> {
    guard: &'a BudgetGuard,
    amount: f64,
    settled: bool,
}

impl Reservation<'_> {
    #[must_use]
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Replace the hold with the call's actual cost.
    pub fn settle(mut self, actual_usd: f64) {
        self.settled = true;
        self.guard.release(self.amount, Some(actual_usd));
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.guard.release(self.amount, None);
        }
    }
}
