pub mod display_list_canvas;
