use cosmwasm_schema::cw_serde;

/// Ownership of a farming plan.
///
/// Public plans are created through governance and funded from an existing
/// account. Private plans are created by any account, get a derived farming
/// pool and return leftover pool coins to their creator on termination.
#[cw_serde]
pub enum PlanType {
    Public,
    Private,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Public => "public",
            PlanType::Private => "private",
        }
    }
}
