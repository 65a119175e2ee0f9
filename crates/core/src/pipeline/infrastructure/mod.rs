pub mod threaded_acquisition_worker;
