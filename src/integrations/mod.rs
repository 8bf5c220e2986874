#[cfg(test)]
pub mod fake;
pub mod wechat;

pub use wechat::{IdentityProvider, Profile, WechatClient};
