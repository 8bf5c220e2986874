/// Application constants

pub const API_VERSION: &str = "v1";

// Game board
pub const DEFAULT_TIME_LIMIT_SECS: i32 = 180;
pub const JSON_FIELD_MAX_CHARS: usize = 2000;

// User profile column sizes
pub const OPENID_MAX_CHARS: usize = 100;
pub const NICKNAME_MAX_CHARS: usize = 100;
pub const AVATAR_URL_MAX_CHARS: usize = 500;

// Synthesized nickname: prefix + 4 chars from A-Z0-9
pub const ROBOT_NAME_PREFIX: &str = "机器人_";
pub const ROBOT_NAME_SUFFIX_LEN: usize = 4;
pub const ROBOT_NAME_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

// Pagination
pub const DEFAULT_PAGE_LIMIT: i64 = 100;
pub const MAX_PAGE_LIMIT: i64 = 1000;

// WeChat
pub const WECHAT_DEFAULT_API_BASE: &str = "https://api.weixin.qq.com";
pub const WECHAT_PROFILE_LANG: &str = "zh_CN";
