pub(crate) mod sys;

mod device;

pub use device::DeviceImpl;
