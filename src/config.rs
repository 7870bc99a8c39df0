use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::ProductId;

/// explicit operation context for the cooperative
///
/// Passed into every operation that needs policy decisions; there are no
/// implicit global defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaccoConfig {
    /// one-off fee invoiced at registration
    pub registration_fee: Money,
    pub charge_registration_fee_on_onboarding: bool,
    /// products allowed to run in parallel with an existing active loan
    /// (e.g. table-banking products)
    pub parallel_loan_products: HashSet<ProductId>,
    /// when set, the sum of guarantee amounts must cover the loan amount;
    /// the reference behavior computes the ratio but does not enforce it
    pub enforce_guarantor_coverage: bool,
}

impl Default for SaccoConfig {
    fn default() -> Self {
        Self {
            registration_fee: Money::from_major(1_000),
            charge_registration_fee_on_onboarding: true,
            parallel_loan_products: HashSet::new(),
            enforce_guarantor_coverage: false,
        }
    }
}

impl SaccoConfig {
    pub fn allows_parallel_loan(&self, product: ProductId) -> bool {
        self.parallel_loan_products.contains(&product)
    }
}
