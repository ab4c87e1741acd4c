pub mod groups;
pub mod help;
pub mod main_menu;
pub mod user_detail;
pub mod users;
