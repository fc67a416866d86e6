pub mod results_interface;
