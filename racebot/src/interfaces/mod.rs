pub mod host_interface;
