mod bookmarks;
mod controls;
mod details;
mod panels;
