pub mod head;
pub mod sitemap;
pub mod translations;
