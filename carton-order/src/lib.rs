pub mod invoice;
pub mod manager;
pub mod models;
pub mod notifications;
pub mod repository;

pub use invoice::InvoiceGenerator;
pub use manager::OrderManager;
pub use models::{
    CartItem, DeliveryConfirmation, Invoice, Notification, NotificationChannel, NotificationEvent,
    NotificationStatus, Order, OrderItem, OrderStatus, PaymentStatus, TrackingEvent,
};
pub use notifications::NotificationQueue;
