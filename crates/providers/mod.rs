pub mod esim_access;
