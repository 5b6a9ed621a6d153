//! アップロードのオーケストレーター
//!
//! ドメイン層（セッション、レジストリ、進捗）とリモートAPIを組み合わせ、
//! ブリッジのコマンドに対応する操作を提供する。
//!
//! # 使用例
//!
//! ```no_run
//! use vidup::uploader::{UploadEvent, Uploader};
//!
//! # async fn example() -> Result<(), vidup::uploader::UploadError> {
//! let uploader = Uploader::new();
//! uploader.set_api_key("my_api_key");
//!
//! let mut handle = uploader.upload("op1", "vi1234", "/tmp/a.mp4")?;
//! while let Some(event) = handle.recv().await {
//!     match event {
//!         UploadEvent::Progress(percent) => println!("{}%", percent),
//!         UploadEvent::Success(video) => println!("{:?}", video.video_id()),
//!         UploadEvent::Cancelled => println!("cancelled"),
//!         UploadEvent::Failed(err) => eprintln!("{}", err),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod driver;
pub mod error;
pub mod event;
pub mod facade;

pub use error::UploadError;
pub use event::{EventSink, OperationHandle, UploadEvent};
pub use facade::Uploader;
