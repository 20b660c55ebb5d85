pub mod bot;
pub mod game_logic;
pub mod poker;
pub mod protocol;
pub mod settlement;
