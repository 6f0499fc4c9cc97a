pub mod admins;
pub mod categories;
pub mod order_lines;
pub mod orders;
pub mod products;
pub mod promocodes;

pub use admins::Entity as Admins;
pub use categories::Entity as Categories;
pub use order_lines::Entity as OrderLines;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use promocodes::Entity as Promocodes;
