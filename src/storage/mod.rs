pub mod db;
mod memes;
pub mod models;

pub use memes::{MemeRepository, RepoError};
