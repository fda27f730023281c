//! The fixed catalogue of statements the blog runs.
//!
//! Every query the service issues is one of these constants; values are
//! always supplied through `?` placeholders.

pub const INSERT_USER: &str = "INSERT INTO users (username, password) VALUES (?, ?)";

pub const FIND_USER_BY_CREDENTIALS: &str =
    "SELECT id, username FROM users WHERE username = ? AND password = ?";

pub const LIST_POSTS: &str = "\
SELECT p.id, p.title, p.created_at, u.username \
FROM posts p \
JOIN users u ON p.user_id = u.id \
ORDER BY p.created_at DESC";

pub const FIND_POST: &str = "\
SELECT p.id, p.user_id, p.title, p.content, p.image_path, p.created_at, u.username \
FROM posts p \
JOIN users u ON p.user_id = u.id \
WHERE p.id = ?";

pub const INSERT_POST: &str =
    "INSERT INTO posts (user_id, title, content, image_path) VALUES (?, ?, ?, ?)";

pub const LIST_COMMENTS: &str = "\
SELECT c.content, c.created_at, u.username \
FROM comments c \
JOIN users u ON c.user_id = u.id \
WHERE c.post_id = ? \
ORDER BY c.created_at ASC";

pub const INSERT_COMMENT: &str =
    "INSERT INTO comments (post_id, user_id, content) VALUES (?, ?, ?)";
