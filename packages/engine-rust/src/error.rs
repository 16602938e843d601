/// Errors returned by order manager operations.
///
/// None of these are fatal: each is logged where it is detected and handed
/// back to the caller, who decides whether to ignore it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("category {category} is full ({capacity} participants)")]
    CapacityExhausted { category: String, capacity: usize },
    #[error("participant {id} is not managed")]
    Unmanaged { id: String },
    #[error("order {order} already held by {existing}, cannot assign it to {incoming}")]
    DuplicateOrder {
        order: i32,
        existing: String,
        incoming: String,
    },
    #[error("participant {id} already has an order")]
    DuplicateParticipant { id: String },
}
