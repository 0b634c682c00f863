pub mod products;
pub mod public_orders;
pub mod staff_orders;
pub mod webpay;
pub mod webpay_client;
