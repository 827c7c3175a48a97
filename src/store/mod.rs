pub mod assets;
pub mod deck;
