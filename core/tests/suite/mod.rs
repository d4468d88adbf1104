mod lifecycle;
mod navigation;
mod pagination;
