mod common;
mod durability;
mod gates;
mod publishing;
mod replies;
