pub mod attendee;
pub mod event;
pub mod order;
pub mod reservation;
pub mod summary;
pub mod ticket;

pub use attendee::{Attendee, AttendeeListing, TokenHolder};
pub use event::{Event, EventDraft, EventStatus};
pub use order::{CartLine, CustomerContact, Order, OrderDetails, OrderItem, OrderRequest, OrderStatus};
pub use reservation::{HoldRequest, Reservation, ReservationStatus};
pub use summary::{DashboardSummary, EventSummary};
pub use ticket::{EventTicketType, TicketKind, TicketTypeDraft};
