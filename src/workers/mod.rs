pub mod promo_sweeper;
