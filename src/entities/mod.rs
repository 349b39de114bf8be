//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod bill;
pub mod bill_item;
pub mod booking;
pub mod booking_charge;
pub mod dining_table;
pub mod loyalty_customer;
pub mod menu_item;
pub mod order;
pub mod order_item;
pub mod room;
pub mod system_state;

// Re-export specific types to avoid conflicts
pub use bill::{BillStatus, Entity as Bill, Model as BillModel, PaymentMethod};
pub use bill_item::{Entity as BillItem, Model as BillItemModel};
pub use booking::{BookingStatus, Entity as Booking, Model as BookingModel};
pub use booking_charge::{Entity as BookingCharge, Model as BookingChargeModel};
pub use dining_table::{Entity as DiningTable, Model as DiningTableModel, OccupancyStatus};
pub use loyalty_customer::{Entity as LoyaltyCustomer, Model as LoyaltyCustomerModel};
pub use menu_item::{Entity as MenuItem, Model as MenuItemModel, StockType};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use room::{Entity as Room, Model as RoomModel};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
