// Domain 層：路由模型與引擎使用的介面

pub mod model;
pub mod ports;
